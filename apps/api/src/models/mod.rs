pub mod toolkit;
