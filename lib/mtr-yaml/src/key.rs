/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t() {
        assert_eq!(normalize("Expiry"), "expiry");
        assert_eq!(normalize("buffer-length"), "buffer_length");
        assert_eq!(normalize("Buffer-Length"), "buffer_length");
    }
}
