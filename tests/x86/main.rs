mod common;
mod pipeline;
mod registers;
