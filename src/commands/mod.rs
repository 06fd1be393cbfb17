pub mod ci;
pub mod doctor;
pub mod install;
pub mod list;
pub mod lock;

use anyhow::Result;
use reconcile::{ClientAdapter, CurrentState, Error, Lockfile, Scope, ServerMap, VerifyReport};

/// Read one scope for verification; unsupported scopes read as empty
pub fn read_known<A: ClientAdapter + ?Sized>(adapter: &A, scope: Scope) -> Result<ServerMap> {
    if !adapter.capabilities().supports(scope) {
        return Ok(ServerMap::new());
    }
    match adapter.read_current(scope)? {
        CurrentState::Known(servers) => Ok(servers),
        CurrentState::Unknown => Err(Error::CurrentStateUnknown { scope }.into()),
    }
}

/// Verify a lock against both scopes of one client
///
/// Recorded scopes are mapped to the scopes this client realizes them in.
pub fn verify_client<A: ClientAdapter + ?Sized>(adapter: &A, lock: &Lockfile) -> Result<VerifyReport> {
    let lock = lock.realized_for(&adapter.capabilities())?;
    let project = read_known(adapter, Scope::Project)?;
    let user = read_known(adapter, Scope::User)?;
    Ok(reconcile::verify_lock(adapter.id(), &lock, &project, &user))
}
