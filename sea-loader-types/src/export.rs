pub use time;
