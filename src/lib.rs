#![no_std]
#[cfg(feature = "std")]
extern crate std;

mod utils;


pub mod command;
pub mod registers;
#[cfg(feature = "hub")]
pub mod hub;
#[cfg(feature = "board")]
pub mod board;
