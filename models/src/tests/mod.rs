mod activity;
mod ready;
