// Loading flag that is lowered again however the guarded call ends,
// including when the caller drops the future mid-request

pub(crate) struct BusyFlag<'a>(&'a mut bool);

impl<'a> BusyFlag<'a> {
    pub(crate) fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        BusyFlag(flag)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_lowered_on_drop() {
        let mut loading = false;
        {
            let _busy = BusyFlag::raise(&mut loading);
        }
        assert!(!loading);
    }
}
