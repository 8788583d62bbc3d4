//! Integration tests for vmroots live under `tests/`.
