use std::{fmt, str::FromStr};

use crate::error::PrepareError;

pub const ID_SIZE: usize = size_of::<u32>();
pub const USERNAME_SIZE: usize = 33;
pub const EMAIL_SIZE: usize = 256;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// The fixed row the shell stores: `id` is the tree key, `username` and
/// `email` are opaque null-padded ASCII blobs as far as the engine cares.
#[derive(Debug, Clone)]
pub struct Row {
    id: u32,
    username: [u8; USERNAME_SIZE],
    email: [u8; EMAIL_SIZE],
}

impl Row {
    pub fn new(id: &str, username: &str, email: &str) -> Result<Self, PrepareError> {
        let id = id.parse::<u32>().map_err(|_| PrepareError::InvalidId)?;

        let username_bytes = username.as_bytes();
        let mut username = [0; USERNAME_SIZE];
        username[..username_bytes.len()].copy_from_slice(username_bytes);

        let email_bytes = email.as_bytes();
        let mut email = [0; EMAIL_SIZE];
        email[..email_bytes.len()].copy_from_slice(email_bytes);

        Ok(Self {
            id,
            username,
            email,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn username(&self) -> String {
        String::from_utf8_lossy(&self.username)
            .trim_end_matches(char::from(0))
            .to_string()
    }

    pub fn email(&self) -> String {
        String::from_utf8_lossy(&self.email)
            .trim_end_matches(char::from(0))
            .to_string()
    }

    pub fn serialize(&self, dest: &mut [u8; ROW_SIZE]) {
        let start = 0;
        let end = ID_SIZE;
        dest[start..end].copy_from_slice(&self.id.to_le_bytes());

        let start = end;
        let end = start + USERNAME_SIZE;
        dest[start..end].copy_from_slice(&self.username);

        let start = end;
        let end = start + EMAIL_SIZE;
        dest[start..end].copy_from_slice(&self.email);
    }

    pub fn deserialize(bytes: &[u8]) -> Self {
        let start = 0;
        let end = ID_SIZE;
        let mut id_bytes = [0; ID_SIZE];
        id_bytes.copy_from_slice(&bytes[start..end]);
        let id = u32::from_le_bytes(id_bytes);

        let start = end;
        let end = start + USERNAME_SIZE;
        let mut username = [0; USERNAME_SIZE];
        username.copy_from_slice(&bytes[start..end]);

        let start = end;
        let end = start + EMAIL_SIZE;
        let mut email = [0; EMAIL_SIZE];
        email.copy_from_slice(&bytes[start..end]);

        Self {
            id,
            username,
            email,
        }
    }
}

impl FromStr for Row {
    type Err = PrepareError;

    fn from_str(row: &str) -> Result<Self, Self::Err> {
        let columns: Vec<&str> = row.split_whitespace().collect();
        match columns[..] {
            [id, username, email] => {
                if id.starts_with('-') {
                    return Err(PrepareError::InvalidId);
                }

                if username.len() > USERNAME_SIZE {
                    return Err(PrepareError::StringTooLong);
                }

                if email.len() > EMAIL_SIZE {
                    return Err(PrepareError::StringTooLong);
                }

                Self::new(id, username, email)
            }
            _ => Err(PrepareError::SyntaxError),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username(), self.email())
    }
}
