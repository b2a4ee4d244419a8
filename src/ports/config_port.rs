//! Configuration access port trait.

pub trait ConfigPort {
    /// Raw value for `key` in `section`; typed parsing happens in the caller.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
