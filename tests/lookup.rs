mod tests {
    use std::collections::HashSet;

    use ledgrid_controller::{
        LINE_COUNT, LINE_PIXELS, LineRemap, LookupTable, Segment, TopologyStore,
    };

    fn built(topology: &TopologyStore, remap: &LineRemap) -> LookupTable {
        let mut table = LookupTable::new();
        table.rebuild(topology, remap);
        table
    }

    #[test]
    fn serpentine_rows_alternate_direction() {
        let topology = TopologyStore::new();
        let table = built(&topology, &LineRemap::identity());

        // Row 0 (31 pixels) runs forward from the line base.
        for x in 0..31 {
            assert_eq!(table.resolve(0, 0, x), Some(x as u16));
        }
        // Row 1 (30 pixels) runs backward: its highest x is the next
        // physical pixel in the chain.
        assert_eq!(table.resolve(0, 1, 29), Some(31));
        assert_eq!(table.resolve(0, 1, 0), Some(60));
        // Row 2 (29 pixels) forward again.
        assert_eq!(table.resolve(0, 2, 0), Some(61));
        assert_eq!(table.resolve(0, 2, 28), Some(89));
        // Row 3 (30 pixels) backward, ending on the last chained pixel.
        assert_eq!(table.resolve(0, 3, 29), Some(90));
        assert_eq!(table.resolve(0, 3, 0), Some(119));
    }

    #[test]
    fn each_map_lays_out_on_its_own_line() {
        let topology = TopologyStore::new();
        let table = built(&topology, &LineRemap::identity());

        for map in 0..LINE_COUNT {
            let base = (map * LINE_PIXELS) as u16;
            assert_eq!(table.resolve(map, 0, 0), Some(base));
        }
    }

    #[test]
    fn flip_inverts_row_direction() {
        let mut topology = TopologyStore::new();
        assert!(topology.set_flip(0, true));
        let table = built(&topology, &LineRemap::identity());

        // Even rows now run backward...
        assert_eq!(table.resolve(0, 0, 30), Some(0));
        assert_eq!(table.resolve(0, 0, 0), Some(30));
        // ...and odd rows forward.
        assert_eq!(table.resolve(0, 1, 0), Some(31));
        assert_eq!(table.resolve(0, 1, 29), Some(60));
    }

    #[test]
    fn out_of_range_queries_are_absent() {
        let topology = TopologyStore::new();
        let table = built(&topology, &LineRemap::identity());

        assert_eq!(table.resolve(LINE_COUNT, 0, 0), None);
        assert_eq!(table.resolve(0, 4, 0), None); // beyond the last row
        assert_eq!(table.resolve(0, 0, 31), None); // beyond row 0's length
        assert_eq!(table.resolve(0, 1, 30), None);
        assert_eq!(table.resolve(0, 0, LINE_PIXELS), None);
    }

    #[test]
    fn indices_are_unique_within_a_line_for_both_flips() {
        for flip in [false, true] {
            let mut topology = TopologyStore::new();
            for map in 0..LINE_COUNT {
                assert!(topology.set_flip(map, flip));
            }
            let table = built(&topology, &LineRemap::identity());

            for map in 0..LINE_COUNT {
                let line_base = map * LINE_PIXELS;
                let mut seen = HashSet::new();
                let map_topology = topology.map(map).unwrap();
                for row in 0..map_topology.row_count() {
                    for x in 0..map_topology.row_len(row).unwrap() {
                        let index = table.resolve(map, row, x).unwrap() as usize;
                        assert!(index >= line_base && index < line_base + LINE_PIXELS);
                        assert!(seen.insert(index), "duplicate index {index}");
                    }
                }
            }
        }
    }

    #[test]
    fn rebuild_is_idempotent() {
        let topology = TopologyStore::new();
        let remap = LineRemap::identity();
        let mut table = LookupTable::new();
        table.rebuild(&topology, &remap);

        let mut snapshot = Vec::new();
        for map in 0..LINE_COUNT {
            for row in 0..8 {
                for x in 0..LINE_PIXELS {
                    snapshot.push(table.resolve(map, row, x));
                }
            }
        }

        table.rebuild(&topology, &remap);

        let mut i = 0;
        for map in 0..LINE_COUNT {
            for row in 0..8 {
                for x in 0..LINE_PIXELS {
                    assert_eq!(table.resolve(map, row, x), snapshot[i]);
                    i += 1;
                }
            }
        }
    }

    #[test]
    fn remap_moves_a_map_onto_another_line() {
        let topology = TopologyStore::new();
        let mut remap = LineRemap::identity();
        assert!(remap.set(3, 5));
        let table = built(&topology, &remap);

        assert_eq!(table.resolve(3, 0, 0), Some((5 * LINE_PIXELS) as u16));
        assert_eq!(table.resolve(3, 3, 0), Some((5 * LINE_PIXELS + 119) as u16));
    }

    #[test]
    fn aliased_maps_share_a_line() {
        let topology = TopologyStore::new();
        let mut remap = LineRemap::identity();
        assert!(remap.set(1, 0));
        let table = built(&topology, &remap);

        assert_eq!(table.resolve(0, 0, 0), table.resolve(1, 0, 0));
    }

    #[test]
    fn rebuild_drops_stale_entries() {
        let mut topology = TopologyStore::new();
        assert!(topology.apply_segments(
            0,
            &[Segment::vertical(60), Segment::vertical(60)]
        ));
        let remap = LineRemap::identity();
        let mut table = LookupTable::new();
        table.rebuild(&topology, &remap);
        assert_eq!(table.resolve(0, 0, 59), Some(59));

        assert!(topology.apply_segments(
            0,
            &[Segment::vertical(31), Segment::vertical(30)]
        ));
        table.rebuild(&topology, &remap);

        assert_eq!(table.resolve(0, 0, 59), None);
        assert_eq!(table.resolve(0, 2, 0), None);
    }

    #[test]
    fn overlong_rows_truncate_at_the_line_budget() {
        let mut topology = TopologyStore::new();
        assert!(topology.apply_segments(
            0,
            &[Segment::vertical(100), Segment::vertical(100)]
        ));
        let table = built(&topology, &LineRemap::identity());

        // Row 0 fits whole.
        assert_eq!(table.resolve(0, 0, 99), Some(99));
        // Row 1 is backward; only its high-x end has physical pixels left.
        assert_eq!(table.resolve(0, 1, 99), Some(100));
        assert_eq!(table.resolve(0, 1, 80), Some(119));
        assert_eq!(table.resolve(0, 1, 79), None);
        assert_eq!(table.resolve(0, 1, 0), None);
    }
}
