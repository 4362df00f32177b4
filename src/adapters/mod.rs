pub mod dispatchers;
