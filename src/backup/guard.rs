use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::drivers::Connection;
use crate::error::Result;

/// Foreign-key enforcement is switched off while the guard lives.
///
/// [`release`](ForeignKeyGuard::release) switches it back on and reports
/// failures; dropping the guard on any other path (an error during the copy)
/// switches it back on as well and logs instead.
pub struct ForeignKeyGuard<'a, C: Connection + ?Sized> {
    conn: &'a mut C,
    released: bool,
}

impl<'a, C: Connection + ?Sized> ForeignKeyGuard<'a, C> {
    pub fn acquire(conn: &'a mut C) -> Result<Self> {
        conn.set_foreign_key_checks(false)?;
        Ok(Self { conn, released: false })
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.conn.set_foreign_key_checks(true)
    }
}

impl<C: Connection + ?Sized> Deref for ForeignKeyGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.conn
    }
}

impl<C: Connection + ?Sized> DerefMut for ForeignKeyGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
    }
}

impl<C: Connection + ?Sized> Drop for ForeignKeyGuard<'_, C> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.conn.set_foreign_key_checks(true) {
            warn!("Failed to re-enable foreign key checks: {}", err);
        }
    }
}
