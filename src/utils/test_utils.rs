//! Test utilities: hand-assembled contracts and a stand-in compiler.

#[cfg(test)]
pub mod utils {
    use crate::config::Config;
    use crate::core::errors::{PtErrorKind, error_selector};
    use crate::types::address::Address;
    use std::path::{Path, PathBuf};

    /// Init code whose runtime returns the deployer as a word for any call.
    pub const OWNER_INIT: &str = "335f556008600d5f3960085ff35f545f5260205ff3";

    /// Owner reported by contracts built from `fixture:foreign-owner` sources.
    pub fn foreign_owner() -> Address {
        Address::from_tag(b"foreign")
    }

    pub fn owner(tag: &str) -> Address {
        Address::from_tag(tag.as_bytes())
    }

    /// Init code whose runtime always returns `owner` as a word.
    pub fn fixed_owner_init(owner: &Address) -> String {
        format!("73{}5f55600860215f3960085ff35f545f5260205ff3", owner.to_hex())
    }

    /// Init code that reverts with the bare selector of `kind`.
    pub fn revert_init(kind: PtErrorKind) -> String {
        let selector = error_selector(kind).unwrap_or_default();
        format!("63{}60e01b5f5260045ffd", hex::encode(selector))
    }

    /// Init code that deploys `runtime` unchanged.
    pub fn runtime_init(runtime: &[u8]) -> String {
        format!(
            "61{:04x}600c5f3961{:04x}5ff3{}",
            runtime.len(),
            runtime.len(),
            hex::encode(runtime)
        )
    }

    /// Init code whose runtime returns `blob` verbatim for any call.
    pub fn returning_init(blob: &[u8]) -> String {
        let mut runtime = hex::decode(format!(
            "61{:04x}600c5f3961{:04x}5ff3",
            blob.len(),
            blob.len()
        ))
        .unwrap();
        runtime.extend_from_slice(blob);
        runtime_init(&runtime)
    }

    /// Init code whose runtime reverts with the bare selector of `kind`.
    pub fn reverting_init(kind: PtErrorKind) -> String {
        let selector = error_selector(kind).unwrap_or_default();
        let runtime = hex::decode(format!("63{}60e01b5f5260045ffd", hex::encode(selector))).unwrap();
        runtime_init(&runtime)
    }

    /// Writes an executable shell script that mimics the compiler CLI.
    ///
    /// It writes `<out>/<stem>.bin` and `<out>/<stem>.abi` and appends the
    /// stem to `invocations` next to the script. The bytecode depends on
    /// markers in the source:
    /// - `fixture:broken`: no output, exit code 1
    /// - `fixture:revert-already-registered`: constructor reverts with the
    ///   kind's `*AlreadyRegistered` error
    /// - `fixture:revert-missing`: constructor reverts with `FeatureMissing`
    /// - `fixture:foreign-owner`: `getOwner()` reports [`foreign_owner`]
    /// - otherwise `getOwner()` reports the deployer
    ///
    /// The stem is appended to the init code so each name deploys to its own
    /// address.
    pub fn write_fake_compiler(dir: &Path) -> PathBuf {
        let path = dir.join("fake-solc.sh");
        let script = format!(
            r#"#!/bin/sh
out=""
src=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o|--evm-version|--base-path|--include-path) [ "$1" = "-o" ] && out="$2"; shift 2 ;;
    --*) shift ;;
    *) src="$1"; shift ;;
  esac
done
stem=$(basename "$src" .sol)
echo "$stem" >> "$(dirname "$0")/invocations"
if grep -q "fixture:broken" "$src"; then
  echo "Error: fixture marked broken" >&2
  exit 1
fi
tag=$(printf '%s' "$stem" | od -An -tx1 | tr -d ' \n')
if grep -q "fixture:revert-already-registered" "$src"; then
  if grep -q "is TransformationBase" "$src"; then code="{transformation}"
  elif grep -q "is ConditionBase" "$src"; then code="{condition}"
  elif grep -q "is FeatureBase" "$src"; then code="{feature}"
  else code="{particle}"
  fi
elif grep -q "fixture:revert-missing" "$src"; then
  code="{missing}"
elif grep -q "fixture:foreign-owner" "$src"; then
  code="{foreign}"
else
  code="{owner}"
fi
mkdir -p "$out"
printf '%s%s' "$code" "$tag" > "$out/$stem.bin"
printf '[]' > "$out/$stem.abi"
echo "Compiler run successful."
"#,
            transformation = revert_init(PtErrorKind::TransformationAlreadyRegistered),
            condition = revert_init(PtErrorKind::ConditionAlreadyRegistered),
            feature = revert_init(PtErrorKind::FeatureAlreadyRegistered),
            particle = revert_init(PtErrorKind::ParticleAlreadyRegistered),
            missing = revert_init(PtErrorKind::FeatureMissing),
            foreign = fixed_owner_init(&foreign_owner()),
            owner = OWNER_INIT,
        );
        std::fs::write(&path, script).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    /// Stems compiled so far by the script from [`write_fake_compiler`].
    pub fn compiler_invocations(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("invocations"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Lays out the bootstrap contract sources under `<dir>/pt`.
    pub fn write_pt_tree(dir: &Path) -> PathBuf {
        let pt = dir.join("pt");
        for (sub, file) in [
            ("registry", "RegistryBase.sol"),
            ("proxy", "PTRegistryProxy.sol"),
            ("runner", "Runner.sol"),
            ("proxy", "PTContractProxy.sol"),
        ] {
            let d = pt.join("contracts").join(sub);
            std::fs::create_dir_all(&d).unwrap();
            std::fs::write(d.join(file), "// bootstrap\n").unwrap();
        }
        std::fs::create_dir_all(pt.join("node_modules")).unwrap();
        pt
    }

    /// Config rooted in `dir` using the fake compiler.
    pub fn test_config(dir: &Path) -> Config {
        Config {
            solc_path: write_fake_compiler(dir),
            pt_path: write_pt_tree(dir),
            storage_path: dir.join("storage"),
            ..Config::default()
        }
    }
}
