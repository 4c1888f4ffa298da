// record
/// Build a committed `Record` from `field => value` pairs.
///
/// ```ignore
/// let post = record! { "id" => 1, "title" => "hello" };
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::record::Record::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::record::Record::from_fields([
            $(($field, $crate::value::Value::from($value))),+
        ])
    };
}
