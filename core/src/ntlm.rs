use arrayvec::ArrayVec;
use digest::{
    FixedOutput, FixedOutputReset, HashMarker, Output, OutputSizeUser, Reset, Update,
};
use md4::Md4;

/// Wrapper over Rust-Crypto's Md4 since Ntlm is not supported natively.
/// The input is expected to be ASCII, which is UTF-16LE encoded before being fed to Md4.
#[derive(Clone, Default)]
pub struct Ntlm(Md4);

impl HashMarker for Ntlm {}

impl OutputSizeUser for Ntlm {
    type OutputSize = <Md4 as OutputSizeUser>::OutputSize;
}

impl Update for Ntlm {
    #[inline]
    fn update(&mut self, data: &[u8]) {
        for chunk in data.chunks(32) {
            let utf16_le: ArrayVec<u8, 64> = chunk.iter().flat_map(|&c| [c, 0]).collect();
            Update::update(&mut self.0, &utf16_le);
        }
    }
}

impl FixedOutput for Ntlm {
    #[inline]
    fn finalize_into(self, out: &mut Output<Self>) {
        FixedOutput::finalize_into(self.0, out)
    }
}

impl FixedOutputReset for Ntlm {
    #[inline]
    fn finalize_into_reset(&mut self, out: &mut Output<Self>) {
        FixedOutputReset::finalize_into_reset(&mut self.0, out)
    }
}

impl Reset for Ntlm {
    #[inline]
    fn reset(&mut self) {
        Reset::reset(&mut self.0)
    }
}
