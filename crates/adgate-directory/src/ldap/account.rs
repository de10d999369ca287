//! AD account attributes and result codes

use adgate_core::DirectoryError;

/// userAccountControl: account disabled
pub const ACCOUNTDISABLE: u32 = 0x0002;
/// userAccountControl: default account type for a typical user
pub const NORMAL_ACCOUNT: u32 = 0x0200;
/// userAccountControl: password never expires
pub const DONT_EXPIRE_PASSWORD: u32 = 0x1_0000;

/// Encode a password for `unicodePwd`: quoted, then UTF-16LE
pub fn encode_ad_password(password: &str) -> Result<Vec<u8>, DirectoryError> {
    if password.is_empty() {
        return Err(DirectoryError::InvalidInput(
            "Password cannot be empty".to_string(),
        ));
    }

    let quoted = format!("\"{password}\"");
    Ok(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect())
}

/// userAccountControl for a new account
pub fn new_account_uac(enabled: bool, password_expires: bool) -> u32 {
    let mut uac = NORMAL_ACCOUNT;
    if !enabled {
        uac |= ACCOUNTDISABLE;
    }
    if !password_expires {
        uac |= DONT_EXPIRE_PASSWORD;
    }
    uac
}

/// Set or clear a userAccountControl flag
pub fn with_flag(uac: u32, flag: u32, set: bool) -> u32 {
    if set {
        uac | flag
    } else {
        uac & !flag
    }
}

/// Map an LDAP result code to a directory error
pub fn from_result_code(rc: u32, text: &str) -> DirectoryError {
    let message = if text.is_empty() {
        format!("LDAP result code {}", rc)
    } else {
        format!("LDAP result code {}: {}", rc, text.trim_end_matches('\0').trim())
    };

    match rc {
        // noSuchObject
        32 => DirectoryError::with_status(404, message),
        // entryAlreadyExists
        68 => DirectoryError::with_status(409, message),
        // insufficientAccessRights
        50 => DirectoryError::AccessDenied(message),
        // constraint, syntax and schema violations, unwillingToPerform
        19 | 21 | 53 | 65 => DirectoryError::InvalidInput(message),
        // notAllowedOnNonLeaf
        66 => DirectoryError::with_status(409, message),
        _ => DirectoryError::Backend(message),
    }
}
