//! Diagnostic macros.

/// Emit a predefined diagnostic by code.
///
/// # Example
///
/// ```rust,ignore
/// la_emit!(LA201);
/// la_emit!(LA102, "3 explicit lifetimes still active");
/// ```
#[macro_export]
macro_rules! la_emit {
    ($code:ident) => {{
        $crate::diagnostics::emit::emit(&$crate::diagnostics::$code);
    }};
    ($code:ident, $($ctx:tt)+) => {{
        $crate::diagnostics::emit::emit_with_context(
            &$crate::diagnostics::$code,
            &format!($($ctx)+),
        );
    }};
}

/// Emit a predefined diagnostic when a condition does not hold.
///
/// # Example
///
/// ```rust,ignore
/// la_check!(depth == 0, LA201, "{} pushes outstanding", depth);
/// ```
#[macro_export]
macro_rules! la_check {
    ($cond:expr, $code:ident) => {{
        if !$cond {
            $crate::la_emit!($code);
        }
    }};
    ($cond:expr, $code:ident, $($ctx:tt)+) => {{
        if !$cond {
            $crate::la_emit!($code, $($ctx)+);
        }
    }};
}
