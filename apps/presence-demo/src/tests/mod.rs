mod error;
mod presence;
