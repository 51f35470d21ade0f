// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for flood simulation and hostile input.

use std::net::{IpAddr, Ipv4Addr};
use user_api::models::UserInput;

/// Generate a pool of client identifiers (IPv4 strings in 10.0.0.0/8).
pub fn generate_clients(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c)).to_string()
        })
        .collect()
}

/// Generate well-formed create bodies with distinct emails.
pub fn generate_valid_users(count: usize) -> Vec<UserInput> {
    (0..count)
        .map(|i| UserInput {
            name: Some(format!("User Number {}", letters(i))),
            email: Some(format!("user{i}@example.com")),
            password: Some(format!("secret-{i}")),
            phone: Some(format!("+1 555 01{:02}", i % 100)),
            status: None,
        })
        .collect()
}

/// Names carrying markup; each must be stripped or rejected, never stored raw.
pub fn generate_markup_names() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>Mallory",
        "<b>Bold</b> Name",
        "<img src=x onerror=alert(1)>Eve",
        "Trudy<!-- comment -->",
        "<a href=\"javascript:void(0)\">Oscar</a>",
    ]
}

/// Emails that must fail validation.
pub fn generate_malformed_emails() -> Vec<&'static str> {
    vec![
        "plainaddress",
        "@missing-local.com",
        "missing-at.example.com",
        "two@@example.com",
        "dots..twice@example.com",
        "trailing-dot@example.com.",
        "no-tld@localhost",
        "a@-leading-hyphen.com",
    ]
}

/// Map an index to a short alphabetic suffix so names stay letters-only.
fn letters(mut i: usize) -> String {
    let mut out = String::new();
    loop {
        out.push((b'a' + (i % 26) as u8) as char);
        i /= 26;
        if i == 0 {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_clients() {
        let clients = generate_clients(256);
        assert_eq!(clients.len(), 256);
        let unique: std::collections::HashSet<_> = clients.iter().collect();
        assert_eq!(unique.len(), 256);
        assert_eq!(clients[1], "10.0.0.1");
    }

    #[test]
    fn test_generated_names_are_letters() {
        for user in generate_valid_users(60) {
            let name = user.name.unwrap();
            assert!(name.chars().all(|c| c.is_alphabetic() || c == ' '));
        }
    }
}
