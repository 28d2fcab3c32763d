/// Returns true if `token` is an address the push service accepts.
///
/// Accepted forms are `ExponentPushToken[...]`, `ExpoPushToken[...]` and a bare
/// 8-4-4-4-12 alphanumeric device id.
pub fn is_push_token(token: &str) -> bool {
    let bracketed = (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
        && token.ends_with(']');
    bracketed || is_device_id(token)
}

fn is_device_id(token: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = token.split('-').collect();
    parts.len() == GROUPS.len()
        && parts.iter().zip(GROUPS).all(|(part, len)| {
            part.len() == len && part.chars().all(|c| c.is_ascii_alphanumeric())
        })
}
