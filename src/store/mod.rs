mod database;

pub use database::Database;

#[cfg(test)]
pub(crate) use database::tests as fixtures;
