#![allow(dead_code)]

pub mod vehicle;
