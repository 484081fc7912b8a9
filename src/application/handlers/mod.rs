pub mod screening_handler;
