// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use crate::errors::{StoreError, SweepError};

    #[test]
    fn test_status_code_classification() {
        let not_found =
            StoreError::from_status_code("Pod", "default/web-0", "get pod", 404, "gone");
        assert!(not_found.is_not_found());
        assert_eq!(not_found.kind_label(), "not_found");

        let conflict =
            StoreError::from_status_code("Pod", "default/web-0", "patch pod", 409, "rv");
        assert!(conflict.is_conflict());
        assert_eq!(conflict.kind_label(), "conflict");

        for code in [400, 403, 429, 500, 503] {
            let err =
                StoreError::from_status_code("Pod", "default/web-0", "patch pod", code, "boom");
            assert_eq!(
                err,
                StoreError::transport("patch pod", "boom"),
                "code {code} should be a transport failure"
            );
        }
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::not_found("Node", "ghost-node");
        assert_eq!(err.to_string(), "Node 'ghost-node' not found");

        let err = StoreError::transport("list pods", "connection refused");
        assert_eq!(err.to_string(), "list pods failed: connection refused");
    }

    #[test]
    fn test_sweep_error_display_includes_pod() {
        let err = SweepError::Patch {
            pod: "default/web-2".to_string(),
            source: StoreError::transport("patch pod default/web-2", "timeout"),
        };

        let msg = err.to_string();
        assert!(msg.contains("default/web-2"));
        assert!(msg.contains("timeout"));
    }
}
