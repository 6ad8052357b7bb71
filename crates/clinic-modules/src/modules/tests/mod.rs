mod common;
mod session;
mod tracker;
