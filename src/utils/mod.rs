/// Shared utilities
pub mod command;

#[cfg(test)]
pub mod testing;
