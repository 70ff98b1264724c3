use heck::ToPascalCase;

/// Derive a camelCase operation name from HTTP method + path.
///
/// Used as the display identifier of operations that declare no `operationId`.
///
/// Examples:
/// - `GET /users` → `listUsers`
/// - `POST /users` → `createUser`
/// - `GET /users/{userId}` → `getUser`
/// - `PUT /users/{userId}` → `updateUser`
/// - `DELETE /users/{userId}` → `deleteUser`
/// - `POST /users/{userId}/messages` → `createUserMessages`
/// - `GET /users/{userId}/messages` → `listUserMessages`
pub fn route_to_name(method: &str, path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut resource_parts: Vec<&str> = Vec::new();
    let mut param_before: Vec<bool> = Vec::new();
    let mut ends_with_param = false;

    for seg in &segments {
        if seg.starts_with('{') && seg.ends_with('}') {
            ends_with_param = true;
            if let Some(last) = param_before.last_mut() {
                *last = true;
            }
        } else {
            resource_parts.push(seg);
            param_before.push(false);
            ends_with_param = false;
        }
    }

    let prefix = match method.to_uppercase().as_str() {
        "GET" if ends_with_param => "get",
        "GET" => "list",
        "POST" => "create",
        "PUT" => "update",
        "DELETE" => "delete",
        "PATCH" => "patch",
        "OPTIONS" => "options",
        "HEAD" => "head",
        "TRACE" => "trace",
        _ => "call",
    };

    if resource_parts.is_empty() {
        return prefix.to_string();
    }

    // A segment followed by a parameter names a single item of that collection.
    let mut pascal_parts = String::new();
    for (part, followed_by_param) in resource_parts.iter().zip(&param_before) {
        let word = if *followed_by_param {
            singularize(part)
        } else {
            part.to_string()
        };
        pascal_parts.push_str(&word.to_pascal_case());
    }

    format!("{prefix}{pascal_parts}")
}

/// Naive singularization: strips trailing 's' if present.
fn singularize(word: &str) -> String {
    if word.ends_with("ies") && word.len() > 3 {
        format!("{}y", &word[..word.len() - 3])
    } else if word.ends_with("ses") || word.ends_with("xes") || word.ends_with("zes") {
        word[..word.len() - 2].to_string()
    } else if word.ends_with('s') && !word.ends_with("ss") && word.len() > 1 {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}
