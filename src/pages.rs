/// Descriptor and live-value documents polled each cycle.
///
/// Descriptor pages are the lowercase schema documents served by the
/// controller's web UI; live pages are the uppercase numbered documents
/// carrying current values. List order matters: when several pages echo
/// the same prop, the earliest page's occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSet {
    pub descriptor_pages: Vec<String>,
    pub live_pages: Vec<String>,
}

impl Default for PageSet {
    fn default() -> Self {
        Self {
            descriptor_pages: ["stavjed.xml", "okruh.xml", "tuv1.xml", "biv.xml", "fve.xml", "spot.xml"]
                .map(String::from)
                .to_vec(),
            live_pages: ["STAVJED1.XML", "OKRUH10.XML", "TUV11.XML", "BIV1.XML", "FVE4.XML", "SPOT1.XML"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Served unauthenticated; its Set-Cookie carries the session id.
pub const LOGIN_PAGE: &str = "LOGIN.XML";

/// Login RPC endpoint taking the USER/PASS form.
pub const LOGIN_RPC: &str = "RPC/WEBSES/create.asp";

/// Cheap authenticated page used to verify a session.
pub const INDEX_PAGE: &str = "INDEX.XML";

/// An authenticated response body containing this marker is the login
/// page, meaning the session is missing or expired.
pub const LOGIN_MARKER: &str = "<LOGIN>";
