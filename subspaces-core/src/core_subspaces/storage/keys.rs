//! Key layout
//!
//! Every key starts with a one-byte record prefix. Integers are big-endian so
//! that key order matches numeric order, and addresses are length-prefixed so
//! that "everything in subspace X" or "every member of group Y" is a single
//! prefix scan.
//!
//! ```text
//! 0x01                              -> next subspace id (u64)
//! 0x02 | subspace                   -> Subspace
//! 0x03 | subspace                   -> next section id (u32)
//! 0x04 | subspace | section         -> Section
//! 0x05 | subspace                   -> next group id (u32)
//! 0x06 | subspace | group           -> UserGroup
//! 0x07 | subspace | group | address -> membership marker
//! 0x08 | subspace | section | addr  -> PermissionSet
//! ```

use super::super::errors::{SubspacesError, SubspacesResult};
use super::super::types::{Address, GroupId, SectionId, SubspaceId};

pub const NEXT_SUBSPACE_ID_KEY: &[u8] = &[0x01];
pub const SUBSPACE_PREFIX: u8 = 0x02;
pub const NEXT_SECTION_ID_PREFIX: u8 = 0x03;
pub const SECTION_PREFIX: u8 = 0x04;
pub const NEXT_GROUP_ID_PREFIX: u8 = 0x05;
pub const GROUP_PREFIX: u8 = 0x06;
pub const GROUP_MEMBER_PREFIX: u8 = 0x07;
pub const USER_PERMISSION_PREFIX: u8 = 0x08;

fn with_subspace(prefix: u8, subspace_id: SubspaceId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 8 + 4 + 2 + 64);
    key.push(prefix);
    key.extend_from_slice(&subspace_id.to_be_bytes());
    key
}

fn push_address(key: &mut Vec<u8>, address: &Address) -> SubspacesResult<()> {
    let bytes = address.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| {
        SubspacesError::Validation(format!(
            "address of {} bytes does not fit in a key",
            bytes.len()
        ))
    })?;
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(bytes);
    Ok(())
}

/// Read a length-prefixed address starting at `offset`
pub fn read_address(key: &[u8], offset: usize) -> Option<Address> {
    let len_bytes: [u8; 2] = key.get(offset..offset + 2)?.try_into().ok()?;
    let len = u16::from_be_bytes(len_bytes) as usize;
    let bytes = key.get(offset + 2..offset + 2 + len)?;
    Address::from_key_bytes(bytes)
}

pub fn subspace_key(subspace_id: SubspaceId) -> Vec<u8> {
    with_subspace(SUBSPACE_PREFIX, subspace_id)
}

pub fn next_section_id_key(subspace_id: SubspaceId) -> Vec<u8> {
    with_subspace(NEXT_SECTION_ID_PREFIX, subspace_id)
}

pub fn subspace_sections_prefix(subspace_id: SubspaceId) -> Vec<u8> {
    with_subspace(SECTION_PREFIX, subspace_id)
}

pub fn section_key(subspace_id: SubspaceId, section_id: SectionId) -> Vec<u8> {
    let mut key = subspace_sections_prefix(subspace_id);
    key.extend_from_slice(&section_id.to_be_bytes());
    key
}

pub fn next_group_id_key(subspace_id: SubspaceId) -> Vec<u8> {
    with_subspace(NEXT_GROUP_ID_PREFIX, subspace_id)
}

pub fn subspace_groups_prefix(subspace_id: SubspaceId) -> Vec<u8> {
    with_subspace(GROUP_PREFIX, subspace_id)
}

pub fn group_key(subspace_id: SubspaceId, group_id: GroupId) -> Vec<u8> {
    let mut key = subspace_groups_prefix(subspace_id);
    key.extend_from_slice(&group_id.to_be_bytes());
    key
}

pub fn subspace_group_members_prefix(subspace_id: SubspaceId) -> Vec<u8> {
    with_subspace(GROUP_MEMBER_PREFIX, subspace_id)
}

pub fn group_members_prefix(subspace_id: SubspaceId, group_id: GroupId) -> Vec<u8> {
    let mut key = subspace_group_members_prefix(subspace_id);
    key.extend_from_slice(&group_id.to_be_bytes());
    key
}

pub fn group_member_key(
    subspace_id: SubspaceId,
    group_id: GroupId,
    user: &Address,
) -> SubspacesResult<Vec<u8>> {
    let mut key = group_members_prefix(subspace_id, group_id);
    push_address(&mut key, user)?;
    Ok(key)
}

/// Split a membership key into its group ID and member address
pub fn parse_group_member_key(key: &[u8]) -> Option<(SubspaceId, GroupId, Address)> {
    let subspace_id = SubspaceId::from_be_bytes(key.get(1..9)?.try_into().ok()?);
    let group_id = GroupId::from_be_bytes(key.get(9..13)?.try_into().ok()?);
    let user = read_address(key, 13)?;
    Some((subspace_id, group_id, user))
}

pub fn subspace_user_permissions_prefix(subspace_id: SubspaceId) -> Vec<u8> {
    with_subspace(USER_PERMISSION_PREFIX, subspace_id)
}

pub fn section_user_permissions_prefix(subspace_id: SubspaceId, section_id: SectionId) -> Vec<u8> {
    let mut key = subspace_user_permissions_prefix(subspace_id);
    key.extend_from_slice(&section_id.to_be_bytes());
    key
}

pub fn user_permission_key(
    subspace_id: SubspaceId,
    section_id: SectionId,
    user: &Address,
) -> SubspacesResult<Vec<u8>> {
    let mut key = section_user_permissions_prefix(subspace_id, section_id);
    push_address(&mut key, user)?;
    Ok(key)
}

/// Split an ACL key into its section ID and user address
pub fn parse_user_permission_key(key: &[u8]) -> Option<(SubspaceId, SectionId, Address)> {
    let subspace_id = SubspaceId::from_be_bytes(key.get(1..9)?.try_into().ok()?);
    let section_id = SectionId::from_be_bytes(key.get(9..13)?.try_into().ok()?);
    let user = read_address(key, 13)?;
    Some((subspace_id, section_id, user))
}

/// Prefixes holding every record that belongs to a subspace
pub fn subspace_record_prefixes(subspace_id: SubspaceId) -> [Vec<u8>; 4] {
    [
        subspace_sections_prefix(subspace_id),
        subspace_groups_prefix(subspace_id),
        subspace_group_members_prefix(subspace_id),
        subspace_user_permissions_prefix(subspace_id),
    ]
}

/// Smallest key greater than every key starting with `prefix`, if any
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
