use feast_derive::feast_error;
use std::borrow::Cow;

#[feast_error]
pub enum LookupError {
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Parse failure{}: {source}", format_context(.context))]
    Parse { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },
}

fn parse(raw: &str) -> Result<i64, LookupError> {
    raw.parse::<i64>().context("Parsing driver id")
}

fn find(id: i64) -> Result<i64, LookupError> {
    Err(LookupError::NotFound { message: id.to_string().into(), context: None })
}

fn main() {
    let err = parse("abc").unwrap_err();
    assert_eq!(err.kind(), "Parse");
    assert!(err.to_string().contains("(Parsing driver id)"));

    let err = find(7).context("Online lookup").unwrap_err();
    assert_eq!(err.to_string(), "Not found (Online lookup): 7");
}
