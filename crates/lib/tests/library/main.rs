mod common;
mod evaluation_tests;
mod invalidation_tests;
mod resolve_tests;
