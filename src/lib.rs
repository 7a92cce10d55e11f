// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_snake_case)]
pub mod error;
pub mod grid;
pub mod numerical;
pub mod solvers;
pub mod utils;
