/// Which wire format a request arrived in, and therefore which shape its
/// error body and response must take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    OpenAi,
    Claude,
}
