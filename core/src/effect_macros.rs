//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when a reducer describes async work,
//! particularly fire-and-forget writes whose only interesting outcome is a
//! failure.

/// Create an `Effect::Future` from an async block
///
/// The block must evaluate to `Option<Action>`.
///
/// # Example
///
/// ```rust,ignore
/// use stockroom_core::async_effect;
///
/// async_effect! {
///     let snapshot = source.load_items().await.ok()?;
///     Some(InventoryAction::ItemsFetched { snapshot })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Future` from a fallible async operation
///
/// `Ok(_)` produces no feedback action; `Err(error)` is mapped through
/// `on_error` and fed back into the reducer.
///
/// # Example
///
/// ```rust,ignore
/// use stockroom_core::fallible_effect;
///
/// fallible_effect! {
///     run: source.save_item(item),
///     on_error: |error| InventoryAction::SyncFailed { error: error.to_string() }
/// }
/// ```
#[macro_export]
macro_rules! fallible_effect {
    (
        run: $operation:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move {
            match $operation.await {
                ::std::result::Result::Ok(_) => ::std::option::Option::None,
                ::std::result::Result::Err($error_param) => ::std::option::Option::Some($error_body),
            }
        }))
    };
}
