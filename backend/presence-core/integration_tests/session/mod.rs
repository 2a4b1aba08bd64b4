mod activity;
mod helpers;
mod login;
mod logout;
