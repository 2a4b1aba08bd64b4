mod activity;
mod config;
mod endpoint;
