use std::collections::HashMap;

pub trait Message {
    fn name(&self) -> &'static str;
}

pub type Metadata = HashMap<String, String>;
