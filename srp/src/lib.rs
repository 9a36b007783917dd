#![allow(clippy::many_single_char_names)]

extern crate bignum;
extern crate byteorder;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
extern crate mac;
extern crate rand;

#[allow(non_snake_case)]
pub mod algo;

#[allow(non_snake_case)]
pub mod client;

pub mod communication;

pub mod dictionary;

pub mod errors;

#[allow(non_snake_case)]
pub mod messages;

#[allow(non_snake_case)]
pub mod mitm;

#[allow(non_snake_case)]
pub mod server;

#[allow(non_snake_case)]
pub mod variant;
