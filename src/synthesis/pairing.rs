//! Pairing marker comments with dispatch call sites.
//!
//! A marker owns the first call site after it in the same method, provided
//! no other marker comes between them. Each call site has at most one owner.

use crate::dispatch::DispatchCall;
use crate::marker::MarkerComment;

/// A marker, a call site, or both when paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSite<'m> {
    pub marker: Option<&'m MarkerComment>,
    pub call: Option<&'m DispatchCall>,
}

/// Both inputs must be in source order. Output is in source order of each
/// site's first element.
pub fn pair<'m>(markers: &'m [MarkerComment], calls: &'m [DispatchCall]) -> Vec<SignalSite<'m>> {
    let mut sites = Vec::with_capacity(markers.len() + calls.len());
    let mut owned = vec![false; calls.len()];

    for (index, marker) in markers.iter().enumerate() {
        let next_owner = markers.get(index + 1).map(|next| next.owner);
        let call = calls.iter().enumerate().find(|(call_index, call)| {
            !owned[*call_index]
                && call.start >= marker.owner
                && next_owner.map_or(true, |next| call.start < next)
        });
        match call {
            Some((call_index, call)) => {
                owned[call_index] = true;
                sites.push((
                    marker.owner,
                    SignalSite {
                        marker: Some(marker),
                        call: Some(call),
                    },
                ));
            }
            None => sites.push((
                marker.owner,
                SignalSite {
                    marker: Some(marker),
                    call: None,
                },
            )),
        }
    }
    for (call_index, call) in calls.iter().enumerate() {
        if !owned[call_index] {
            sites.push((
                call.start,
                SignalSite {
                    marker: None,
                    call: Some(call),
                },
            ));
        }
    }

    // stable: a marker sorts before an unowned call on the same token
    sites.sort_by_key(|(position, _)| *position);
    sites.into_iter().map(|(_, site)| site).collect()
}
