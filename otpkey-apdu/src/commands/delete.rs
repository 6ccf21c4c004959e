//! DELETE: remove a credential by name
//!
//! Deleting an absent name succeeds. Touch slots bound to the name are left
//! alone and read as off from then on.

use crate::apdu::{Command, Response};
use crate::oath::{Oath, tags};
use crate::status::Result;
use crate::store::{Clock, CredentialStore};
use crate::tlv::TlvReader;
use crate::types::MAX_NAME_LEN;

use log::{error, info};

/// Handle DELETE
pub fn handle<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    cmd: &Command,
    _resp: &mut Response,
) -> Result<()> {
    let name = TlvReader::new(cmd.data()).expect(tags::NAME, 1, MAX_NAME_LEN)?;
    oath.store().delete(name).map_err(|err| {
        error!("failed to delete credential record: {}", err);
        err
    })?;
    info!("credential deleted");
    Ok(())
}
