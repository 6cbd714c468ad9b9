mod helpers;
mod mocks;

mod admin;
mod cart;
mod checkout;
mod misc;
mod orders;
mod payments;
