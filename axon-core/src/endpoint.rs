//! Endpoint table capability boundary.
//!
//! The table of addressable endpoints is generated elsewhere; the
//! channel only needs this narrow capability surface. Passing it in at
//! construction keeps the dispatch logic testable against a mock table.

use axon_protocol::codec::EndpointRef;

/// Endpoint id reserved for serving the schema blob itself.
///
/// Calls to this endpoint bypass the fingerprint check, so a caller can
/// always discover the schema a device currently exposes.
pub const SCHEMA_ENDPOINT: u16 = 0;

/// Capability surface of a device's endpoint table.
pub trait EndpointTable {
    /// Fingerprint of the schema this table was generated from.
    fn fingerprint(&self) -> u16;

    /// The schema blob describing every endpoint.
    fn schema(&self) -> &[u8];

    /// Invoke endpoint `index` with `input` as its argument bytes.
    ///
    /// On success returns the number of result bytes written to
    /// `output`. `None` marks an unknown index or a rejected call; the
    /// channel drops such calls without a response.
    fn handle(&mut self, index: u16, input: &[u8], output: &mut [u8]) -> Option<usize>;

    /// Whether `reference` resolves to a live endpoint of this table.
    fn is_ref_valid(&self, reference: EndpointRef) -> bool;

    /// Store a float into the numeric property behind `reference`,
    /// converting to the property's own type.
    fn set_from_float(&mut self, reference: EndpointRef, value: f32) -> bool;
}
