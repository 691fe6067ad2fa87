#[cfg(test)]
mod tests {
    use crate::virtual_machine::isa::Opcode;
    use std::collections::HashSet;

    macro_rules! collect_isa {
        (
            $( $name:ident = $opcode:expr, $mnemonic:literal => [$pops:expr, $pushes:expr], $gas:expr ),* $(,)?
        ) => {{
            vec![ $( ($opcode as u8, $mnemonic, $pops as usize, $pushes as usize) ),* ]
        }};
    }

    fn table() -> Vec<(u8, &'static str, usize, usize)> {
        crate::for_each_opcode!(collect_isa)
    }

    #[test]
    fn mnemonics_are_unique() {
        let table = table();
        let names: HashSet<_> = table.iter().map(|(_, m, _, _)| *m).collect();
        assert_eq!(names.len(), table.len());
    }

    #[test]
    fn every_entry_decodes_to_itself() {
        for (byte, mnemonic, _, _) in table() {
            let op = Opcode::try_from(byte).unwrap();
            assert_eq!(op as u8, byte);
            assert_eq!(op.mnemonic(), mnemonic);
        }
    }

    #[test]
    fn dup_and_swap_stack_shapes() {
        for (byte, mnemonic, pops, pushes) in table() {
            if (0x80..=0x8f).contains(&byte) {
                let n = (byte - 0x7f) as usize;
                assert_eq!((pops, pushes), (n, n + 1), "{mnemonic}");
            }
            if (0x90..=0x9f).contains(&byte) {
                let n = (byte - 0x8f) as usize;
                assert_eq!((pops, pushes), (n + 1, n + 1), "{mnemonic}");
            }
        }
    }

    #[test]
    fn log_gas_scales_with_topics() {
        for (byte, mnemonic, pops, _) in table() {
            if (0xa0..=0xa4).contains(&byte) {
                let topics = (byte - 0xa0) as u64;
                let op = Opcode::try_from(byte).unwrap();
                assert_eq!(op.base_gas(), 375 * (topics + 1), "{mnemonic}");
                assert_eq!(pops as u64, 2 + topics);
            }
        }
    }
}
