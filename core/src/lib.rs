#![cfg_attr(not(test), no_std)]

pub mod actions;
pub mod component;
pub mod decode;
pub mod pixel;
pub mod sd;
pub mod sd_image;
pub mod storage;

#[cfg(test)]
mod test;
