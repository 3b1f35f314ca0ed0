/// Creates a single conversation [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use parley::{Role, pl_msg};
///
/// let message = pl_msg!(assistant => "Done.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content, "Done.");
/// ```
#[macro_export]
macro_rules! pl_msg {
    (system => $content:expr $(,)?) => {
        $crate::Message::system($content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::user($content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::assistant($content)
    };
    (tool => $content:expr, $tool_call_id:expr, $function_name:expr $(,)?) => {
        $crate::Message::tool($content, $tool_call_id, $function_name)
    };
    (tool => $content:expr $(,)?) => {
        compile_error!("tool messages need content, tool_call_id, and function_name");
    };
    ($role:ident => $($rest:tt)*) => {
        compile_error!("unsupported role: use system, user, assistant, or tool");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use parley::{Role, pl_messages};
///
/// let messages = pl_messages![
///     system => "You are concise.",
///     user => "Summarize this repository.",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! pl_messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::pl_msg!($role => $content)),+]
    };
}

/// Creates a [`Conversation`](crate::Conversation), optionally seeded with a
/// system prompt.
///
/// ```rust
/// use parley::{Role, pl_conversation};
///
/// let conversation = pl_conversation!("qwen3", "Be concise.");
/// assert_eq!(conversation.model, "qwen3");
/// assert_eq!(conversation.messages()[0].role, Role::System);
/// ```
#[macro_export]
macro_rules! pl_conversation {
    ($model:expr $(,)?) => {
        $crate::Conversation::new($model)
    };
    ($model:expr, $system_prompt:expr $(,)?) => {{
        let mut conversation = $crate::Conversation::new($model);
        conversation.add_system_message($system_prompt);
        conversation
    }};
}
