pub mod cache;
pub mod disposable;
pub mod dns;
pub mod smtp;
pub mod syntax;

#[cfg(test)]
pub(crate) mod testing;
