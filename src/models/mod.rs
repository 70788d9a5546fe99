// src/models/mod.rs

pub mod admin;
pub mod participant;
pub mod question;
pub mod quiz;
pub mod shared_link;
pub mod submission;
