mod support;

mod issuer_tests;
mod rotator_tests;
