mod canonicalization;
