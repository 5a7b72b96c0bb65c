pub mod inspection;
pub mod inspection_query;
pub mod seed;
pub mod template;

#[cfg(test)]
mod test_support;
