use anyhow::Context;

fn main() -> anyhow::Result<()> {
    pixmuse::run().context("pixmuse failed")
}
