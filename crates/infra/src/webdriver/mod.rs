//! W3C WebDriver protocol client

mod client;

pub use client::{Cookie, ElementRef, WebDriverClient};
