//! Helpers for tests that need a real database: throwaway SQLite files and a small seeded catalogue.
pub mod prepare_env;
pub mod seed;
